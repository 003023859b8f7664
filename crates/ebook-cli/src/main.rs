use std::process;

fn main() {
    match ebook_cli::run() {
        Ok(code) => process::exit(code),
        Err(err) => {
            eprintln!("make_mobi error: {err:#}");
            process::exit(1);
        }
    }
}
