fn main() {
    agrisense_lib::run()
}
