use crate::output::{print_fields, print_json, print_table};
use anyhow::{Context, Result};
use playmotion_cli::MotionClient;
use playmotion_core::config::MotionEntry;
use std::path::Path;

// ---------------------------------------------------------------------------
// list
// ---------------------------------------------------------------------------

pub fn list(client: &MotionClient, json: bool) -> Result<()> {
    let mut keys = client.fetch_motions()?;
    keys.sort();

    if json {
        return print_json(&serde_json::json!({ "motion_keys": keys }));
    }
    if keys.is_empty() {
        println!("No motions.");
        return Ok(());
    }
    for key in keys {
        println!("{key}");
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// info
// ---------------------------------------------------------------------------

pub fn info(client: &MotionClient, key: &str, json: bool) -> Result<()> {
    let motion = client.fetch_motion_info(key)?;

    if json {
        return print_json(&motion);
    }

    print_fields(&[
        ("key", motion.key.clone()),
        ("name", motion.name.clone()),
        ("usage", motion.usage.clone()),
        ("description", motion.description.clone()),
        ("joints", motion.joints.join(", ")),
        ("duration", format!("{:.3}s", motion.duration())),
    ]);
    println!();

    let mut headers = vec!["TIME"];
    headers.extend(motion.joints.iter().map(String::as_str));
    let rows: Vec<Vec<String>> = motion
        .times
        .iter()
        .zip(&motion.positions)
        .map(|(time, row)| {
            std::iter::once(format!("{time:.3}"))
                .chain(row.iter().map(|p| format!("{p:.4}")))
                .collect()
        })
        .collect();
    print_table(&headers, &rows);
    Ok(())
}

// ---------------------------------------------------------------------------
// ready
// ---------------------------------------------------------------------------

pub fn ready(client: &MotionClient, key: &str, json: bool) -> Result<()> {
    let is_ready = client.fetch_motion_ready(key)?;
    if json {
        print_json(&serde_json::json!({ "motion": key, "is_ready": is_ready }))
    } else {
        println!("{key}: {}", if is_ready { "ready" } else { "not ready" });
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// add / remove
// ---------------------------------------------------------------------------

/// Add a motion from a file holding one motion entry in motion-file layout
/// (`meta`, `joints`, flat `positions`, `times_from_start`).
pub fn add(client: &MotionClient, key: &str, file: &Path, overwrite: bool, json: bool) -> Result<()> {
    let data = std::fs::read_to_string(file)
        .with_context(|| format!("cannot read {}", file.display()))?;
    let entry: MotionEntry = serde_yaml::from_str(&data)
        .with_context(|| format!("invalid motion entry in {}", file.display()))?;
    let motion = entry.into_motion(key)?;

    client.put_motion(&motion, overwrite)?;

    if json {
        print_json(&serde_json::json!({ "motion": key, "success": true }))
    } else {
        println!("Added motion '{key}'");
        Ok(())
    }
}

pub fn remove(client: &MotionClient, key: &str, json: bool) -> Result<()> {
    client.delete_motion(key)?;
    if json {
        print_json(&serde_json::json!({ "motion": key, "success": true }))
    } else {
        println!("Removed motion '{key}'");
        Ok(())
    }
}
