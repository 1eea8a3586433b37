fn main() -> anyhow::Result<()> {
    kirill::cli::run()
}
