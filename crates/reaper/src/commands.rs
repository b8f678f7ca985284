use crate::cli::{ExportArgs, ReapArgs};
use crate::config;
use reaper_config::ReaperConfig;
use reaper_criteria::Printer;
use reaper_store::Store;

pub async fn reap(config: &ReaperConfig, args: ReapArgs) -> anyhow::Result<()> {
    let format = args.output_format.unwrap_or(config.output_format);
    if args.dry_run {
        tracing::info!("Dry run, no containers will be deleted");
    }

    let reaper = config::create_polling_reaper(config, args.dry_run, Printer::new(format))?;
    let summary = reaper.run(args.all, |line| println!("{line}")).await?;

    if summary.failed > 0 {
        tracing::warn!("{} builds could not be reaped", summary.failed);
    }

    Ok(())
}

pub async fn export(config: &ReaperConfig, args: ExportArgs) -> anyhow::Result<()> {
    let data_directory = args
        .data_directory
        .unwrap_or_else(|| config.data_directory.clone());

    let store = Store::open(&data_directory)?;
    let entries = store.builds().export().await?;
    print!("{}", reaper_api::to_ndjson(&entries)?);

    tracing::info!(
        "Exported {} entries from {}",
        entries.len(),
        data_directory.display()
    );

    Ok(())
}
