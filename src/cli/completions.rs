//! Shell completions module for o4n
//!
//! Provides shell completion scripts for bash, zsh, fish, powershell, and elvish.

use clap::CommandFactory;
use clap_complete::{generate, Shell};
use std::io;

use crate::cli::Cli;

/// Generate shell completions and write to stdout
pub fn generate_completions(shell: Shell) {
    let mut cmd = Cli::command();
    generate(shell, &mut cmd, "o4n", &mut io::stdout());
}

/// Get completions as a string
#[cfg(test)]
pub fn get_completions(shell: Shell) -> String {
    let mut cmd = Cli::command();
    let mut buf = Vec::new();
    generate(shell, &mut cmd, "o4n", &mut buf);
    String::from_utf8(buf).unwrap_or_default()
}

/// Print installation instructions for completions
pub fn print_installation_instructions(shell: Shell) {
    match shell {
        Shell::Bash => {
            println!("# Add to ~/.bashrc:");
            println!("eval \"$(o4n completions bash)\"");
            println!();
            println!("# Or save to the completions directory:");
            println!("o4n completions bash > ~/.local/share/bash-completion/completions/o4n");
        }
        Shell::Zsh => {
            println!("# Save into a directory on your fpath:");
            println!("mkdir -p ~/.zsh/completions");
            println!("o4n completions zsh > ~/.zsh/completions/_o4n");
            println!("# Then in ~/.zshrc: fpath=(~/.zsh/completions $fpath); autoload -Uz compinit && compinit");
        }
        Shell::Fish => {
            println!("o4n completions fish > ~/.config/fish/completions/o4n.fish");
        }
        Shell::PowerShell => {
            println!("# Add to your PowerShell profile:");
            println!("Invoke-Expression (& o4n completions powershell | Out-String)");
        }
        Shell::Elvish => {
            println!("# Add to ~/.elvish/rc.elv:");
            println!("eval (o4n completions elvish | slurp)");
        }
        _ => {
            println!("# Refer to your shell's documentation for completion installation.");
        }
    }
}
