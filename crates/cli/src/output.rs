use crate::error::CliError;
use engine_core::state::models::Watermark;
use serde::Serialize;

fn to_json<T: Serialize>(value: &T) -> Result<String, CliError> {
    Ok(serde_json::to_string_pretty(value)?)
}

pub async fn write_report<T: Serialize>(report: &T, path: &str) -> Result<(), CliError> {
    tokio::fs::write(path, to_json(report)?).await?;
    Ok(())
}

pub fn print_report<T: Serialize>(report: &T) -> Result<(), CliError> {
    println!("{}", to_json(report)?);
    Ok(())
}

pub fn print_watermark(watermark: Option<&Watermark>) {
    match watermark {
        Some(wm) => {
            println!("{:<12} {}", "System", wm.system);
            println!("{:<12} {}", "Entity", wm.entity);
            println!("{:<12} {}", "Last value", wm.last_value);
            println!("{:<12} {}", "Updated at", wm.updated_at);
        }
        None => println!("No watermark stored"),
    }
}

pub fn print_watermark_table(watermarks: &[Watermark]) {
    if watermarks.is_empty() {
        println!("No watermarks stored");
        return;
    }
    println!("{:<20} {:<24} {:<28} {}", "SYSTEM", "ENTITY", "LAST VALUE", "UPDATED AT");
    for wm in watermarks {
        println!(
            "{:<20} {:<24} {:<28} {}",
            wm.system, wm.entity, wm.last_value, wm.updated_at
        );
    }
}
