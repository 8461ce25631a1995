use anyhow::Result;
use menucalc::{Console, Engine, Styler};
use std::io;

fn main() -> Result<()> {
    let stdin = io::stdin();
    let stdout = io::stdout();
    let mut console = Console::new(stdin.lock(), stdout.lock(), Styler::detect(), Engine::new());
    console.run()
}
