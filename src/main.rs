use zentry_coa::{
    chart::ChartOfAccounts,
    config::ChartConfig,
    install,
    interface::cli::{run, Session},
    storage::JsonlAccountStore,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = ChartConfig::load()?;

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&config.log_filter)).init();

    // Database installation
    install::install(&config)?;

    let store = JsonlAccountStore::open(config.accounts_path())?;
    log::info!("account collection at {}", store.path().display());
    let mut chart = ChartOfAccounts::from_config(store, &config);
    chart.load()?;

    if !chart.orphans().is_empty() {
        log::warn!("{} accounts are not reachable from any root, see `orphans`", chart.orphans().len());
    }

    let mut session = Session::new(chart);
    run(&mut session)?;

    Ok(())
}
