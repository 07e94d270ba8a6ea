fn main() -> anyhow::Result<()> {
    loctui::cli::run()
}
