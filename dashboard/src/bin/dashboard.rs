use std::error::Error;

use dashboard::executable_utils::{initialize_executable, run};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    let (args, config) = initialize_executable()?;
    run(args, config).await
}
