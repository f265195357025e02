fn main() {
    kiba::cli::run();
}
