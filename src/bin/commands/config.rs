use super::utils::{resolve_connection, GlobalArgs};
use lidarr_api::{LidarrError, SettingsStore};

/// Store the URL and API key given on the command line.
pub fn handle_save_connection(args: &GlobalArgs) -> Result<(), Box<dyn std::error::Error>> {
    if args.url.is_none() && args.api_key.is_none() {
        return Err(LidarrError::Config(
            "Nothing to save: pass --url and/or --api-key".to_string(),
        )
        .into());
    }

    let mut store = SettingsStore::open(args.config.clone())?;
    let (base_url, api_key) = resolve_connection(args, &store)?;
    store.save_connection(&base_url, &api_key)?;
    println!(
        "💾 Connection settings saved to {}",
        store.path().display()
    );
    Ok(())
}

/// Print the settings file with the API key masked.
pub fn handle_show(args: &GlobalArgs) -> Result<(), Box<dyn std::error::Error>> {
    let store = SettingsStore::open(args.config.clone())?;
    println!("📁 Settings file: {}", store.path().display());

    match store.connection() {
        Some(connection) => {
            println!("\nConnection:");
            println!("   URL: {}", connection.base_url);
            println!("   API key: {}", mask(&connection.api_key));
        }
        None => println!("\nNo saved connection"),
    }

    match store.artist_defaults() {
        Some(defaults) => {
            println!("\nArtist defaults:");
            println!("   Root folder: {}", defaults.root_folder_path);
            println!("   Quality profile ID: {}", defaults.quality_profile_id);
            println!("   Metadata profile ID: {}", defaults.metadata_profile_id);
            println!(
                "   Monitored: {}",
                if defaults.monitored { "Yes" } else { "No" }
            );
            println!("   Album monitoring: {}", defaults.album_monitor_option);
            println!("   Tag IDs: {:?}", defaults.tag_ids);
        }
        None => println!("\nNo saved artist defaults"),
    }
    Ok(())
}

/// Keep the last four characters of a secret.
fn mask(secret: &str) -> String {
    let count = secret.chars().count();
    if count <= 4 {
        return "*".repeat(count);
    }
    let tail: String = secret.chars().skip(count - 4).collect();
    format!("{}{tail}", "*".repeat(count - 4))
}
