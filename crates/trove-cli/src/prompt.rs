//! Interactive terminal prompts

use std::io::{self, BufRead, IsTerminal, Write};
use trove_asset::{Asset, DecisionPort};
use trove_core::{Result, TroveError, Version, VersionField};

/// Whether questions can be asked on this terminal
pub fn is_interactive() -> bool {
    io::stdin().is_terminal()
}

/// Decision port that asks the user on stdin
pub struct TerminalPrompt<R> {
    input: R,
}

impl TerminalPrompt<io::StdinLock<'static>> {
    pub fn stdin() -> Self {
        Self::new(io::stdin().lock())
    }
}

impl<R: BufRead> TerminalPrompt<R> {
    pub fn new(input: R) -> Self {
        Self { input }
    }

    fn read_line(&mut self, question: &str) -> Result<String> {
        print!("{}", question);
        io::stdout().flush()?;
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Err(TroveError::Aborted("input closed".to_string()));
        }
        Ok(line.trim().to_string())
    }

    /// Ask a yes/no question until the answer is one of the two
    pub fn confirm(&mut self, question: &str) -> Result<bool> {
        loop {
            match self.read_line(&format!("{} [y/n]: ", question))?.to_ascii_lowercase().as_str() {
                "y" | "yes" => return Ok(true),
                "n" | "no" => return Ok(false),
                _ => println!("Please answer y or n."),
            }
        }
    }

    /// Ask for free text; an empty answer is asked again
    pub fn ask(&mut self, question: &str) -> Result<String> {
        loop {
            let answer = self.read_line(&format!("{}: ", question))?;
            if !answer.is_empty() {
                return Ok(answer);
            }
        }
    }

    /// Numbered menu over `assets`
    pub fn select<'a>(&mut self, title: &str, assets: &[&'a Asset]) -> Result<&'a Asset> {
        if assets.is_empty() {
            return Err(TroveError::AssetNotFound("nothing to choose from".to_string()));
        }
        println!("{}", title);
        for (i, asset) in assets.iter().enumerate() {
            println!("  {:>3}) {:<8} {}", i + 1, asset.asset_type, asset);
        }
        loop {
            let answer = self.read_line(&format!("Select [1-{}]: ", assets.len()))?;
            match answer.parse::<usize>() {
                Ok(n) if (1..=assets.len()).contains(&n) => return Ok(assets[n - 1]),
                _ => println!("Enter a number between 1 and {}.", assets.len()),
            }
        }
    }
}

impl<R: BufRead> DecisionPort for TerminalPrompt<R> {
    fn publish_new_version(&mut self, asset: &Asset, latest: Version) -> Result<bool> {
        self.confirm(&format!(
            "{}_v{} is already published. Publish a new version?",
            asset.name, latest
        ))
    }

    fn update_to_latest(&mut self, asset: &Asset, latest: Version) -> Result<bool> {
        self.confirm(&format!(
            "A newer version exists ({}). Update {} to it and bump?",
            latest, asset
        ))
    }

    fn choose_bump(&mut self, asset: &Asset) -> Result<VersionField> {
        loop {
            let answer = self.read_line(&format!("Bump {} [major/minor/patch]: ", asset))?;
            match answer.parse::<VersionField>() {
                Ok(field) => return Ok(field),
                Err(e) => println!("{}", e),
            }
        }
    }

    fn reinstall(&mut self, asset: &Asset) -> Result<bool> {
        self.confirm(&format!("{} is already installed. Install again?", asset))
    }
}
