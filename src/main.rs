fn main() {
    study_pal_lib::run()
}
