//! Deforestation detection CLI entry point

fn main() -> anyhow::Result<()> {
    deforest_detect::cli::run()
}
