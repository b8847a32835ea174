#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = quran_logbook::run().await {
        eprintln!("quran-logbook fatal: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}
