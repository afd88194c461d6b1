fn main() -> anyhow::Result<()> {
    startup_valuation::run()
}
