fn main() -> anyhow::Result<()> {
    journal_lib::run()
}
