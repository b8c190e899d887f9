fn main() {
    medalert_lib::run()
}
