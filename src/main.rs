use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    match studio_class_sync::run().await {
        Ok(_) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("studio-class-sync: {err}");
            ExitCode::FAILURE
        }
    }
}
