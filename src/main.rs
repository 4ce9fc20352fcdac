use donut_greeting::{SceneConfig, run};

fn main() -> anyhow::Result<()> {
    run(SceneConfig::default())
}
