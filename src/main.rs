fn main() {
    match kestrel_route::cli::run() {
        Ok(code) => std::process::exit(code),
        Err(error) => {
            eprintln!("{:#}", error);
            std::process::exit(1);
        }
    }
}
