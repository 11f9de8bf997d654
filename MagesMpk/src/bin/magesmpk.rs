fn main() -> anyhow::Result<()> {
    magesmpk::cli::run_cli()
}
