use log::info;

use crate::config::ChartConfig;

fn create_data_files(config: &ChartConfig) -> std::io::Result<()> {
    std::fs::create_dir_all(&config.data_dir)?;

    let accounts = config.accounts_path();
    if accounts.exists() {
        return Ok(());
    }

    std::fs::File::create(&accounts)?;
    info!("created empty account collection at {}", accounts.display());

    Ok(())
}

pub fn install(config: &ChartConfig) -> std::io::Result<()> {
    create_data_files(config)?;
    Ok(())
}
