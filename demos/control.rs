/**
 * Device Control Example
 *
 * Logs in with the credentials from the environment, lists the synced devices
 * and toggles the entity given as the first argument.
 *
 *   ICS_MAC=00:11:22:33:44:55 ICS_EMAIL=me@example.com ICS_PASSWORD_HASH=... \
 *       cargo run --example control -- 3
 */
use ics2000::HubBuilder;
use tokio::time::{Duration, sleep};

#[tokio::main(flavor = "current_thread")]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    println!("--- ics2000 v{} - Device Control ---", ics2000::version());

    let (Ok(mac), Ok(email), Ok(password_hash)) = (
        std::env::var("ICS_MAC"),
        std::env::var("ICS_EMAIL"),
        std::env::var("ICS_PASSWORD_HASH"),
    ) else {
        eprintln!("[ERROR] Set ICS_MAC, ICS_EMAIL and ICS_PASSWORD_HASH");
        return;
    };

    // 1. Connect: login, inventory sync, local discovery
    let hub = match HubBuilder::new(mac, email, password_hash).connect().await {
        Ok(hub) => hub,
        Err(e) => {
            eprintln!("[ERROR] Could not connect: {}", e);
            return;
        }
    };

    println!("[INFO] Route: {:?}", hub.route());
    for device in hub.devices() {
        println!(
            "[DEVICE] {:>6}  {:<24} {:?} {:?}",
            device.id,
            device.name,
            device.device_type,
            device.capabilities()
        );
    }

    let Some(entity) = std::env::args().nth(1).and_then(|a| a.parse::<u32>().ok()) else {
        println!("[INFO] Pass an entity id to toggle it");
        return;
    };

    // 2. Switch on, wait, switch off
    println!("[STEP 1] Switching {} ON...", entity);
    if let Err(e) = hub.switch(entity, true).await {
        eprintln!("[ERROR] Control failed: {}", e);
        return;
    }

    sleep(Duration::from_secs(2)).await;

    println!("[STEP 2] Switching {} OFF...", entity);
    if let Err(e) = hub.switch(entity, false).await {
        eprintln!("[ERROR] Control failed: {}", e);
    }

    // 3. Local delivery is not acknowledged; read back the state from the cloud
    match hub.lamp_status(entity).await {
        Ok(on) => println!("[SUCCESS] Reported state: {}", if on { "on" } else { "off" }),
        Err(e) => eprintln!("[ERROR] Status query failed: {}", e),
    }
}
