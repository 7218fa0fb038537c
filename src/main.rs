fn main() {
    if let Err(err) = syntree_layout::run() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}
