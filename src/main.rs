use std::process;

fn main() {
    match drs::cli::run() {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("drs: {}", e);
            process::exit(e.exit_code());
        }
    }
}
