#![forbid(unsafe_code)]

fn main() {
    navarb_harness::init_tracing();
    if let Err(error) = navarb_harness::run_from_env() {
        eprintln!(
            "{}",
            serde_json::json!({
                "status": "error",
                "error": error.to_string(),
                "exit_code": error.exit_code(),
            })
        );
        std::process::exit(error.exit_code());
    }
}
