/**
 * Discovery Example
 *
 * Broadcasts the hub discovery probe on the local network and prints the
 * address of the hub, if one answers within the timeout.
 */
use ics2000::Scanner;
use tokio::time::Duration;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    println!("--- ics2000 v{} - Hub Discovery ---", ics2000::version());

    let scanner = Scanner::new().with_timeout(Duration::from_secs(10));
    match scanner.discover().await {
        Ok(Some(ip)) => println!("[SUCCESS] Hub found at {}", ip),
        Ok(None) => println!("[INFO] No hub answered; commands would go through the cloud"),
        Err(e) => eprintln!("[ERROR] Discovery failed: {}", e),
    }
}
