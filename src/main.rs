fn main() {
    chartcheck::cli::run();
}
