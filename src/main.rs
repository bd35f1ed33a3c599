fn main() {
    if let Err(e) = digit_classifier_lib::run() {
        eprintln!("{:#}", e);
        std::process::exit(1);
    }
}
