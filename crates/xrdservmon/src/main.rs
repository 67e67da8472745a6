use std::process::ExitCode;

fn main() -> ExitCode {
    match xrdservmon::run() {
        Ok(code) => ExitCode::from(u8::try_from(code).unwrap_or(u8::MAX)),
        Err(error) => {
            if !error.is_logged() {
                eprintln!("xrdservmon: {error}");
            }
            ExitCode::FAILURE
        }
    }
}
