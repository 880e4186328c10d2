fn main() {
    std::process::exit(lazyreq::cli::run());
}
