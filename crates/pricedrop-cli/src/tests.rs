use super::*;

#[test]
fn parses_migrate_command() {
    let cli = Cli::try_parse_from(["pricedrop-cli", "migrate"]).expect("expected valid cli args");
    assert!(matches!(cli.command, Some(Commands::Migrate)));
}

#[test]
fn tick_defaults_to_live_run() {
    let cli = Cli::try_parse_from(["pricedrop-cli", "tick"]).unwrap();
    assert!(matches!(
        cli.command,
        Some(Commands::Tick { dry_run: false })
    ));
}

#[test]
fn tick_accepts_dry_run() {
    let cli = Cli::try_parse_from(["pricedrop-cli", "tick", "--dry-run"]).unwrap();
    assert!(matches!(cli.command, Some(Commands::Tick { dry_run: true })));
}

#[test]
fn end_all_is_kebab_case_and_unconfirmed_by_default() {
    let cli = Cli::try_parse_from(["pricedrop-cli", "end-all"]).unwrap();
    assert!(matches!(cli.command, Some(Commands::EndAll { yes: false })));
}

#[test]
fn end_all_accepts_confirmation() {
    let cli = Cli::try_parse_from(["pricedrop-cli", "end-all", "--yes"]).unwrap();
    assert!(matches!(cli.command, Some(Commands::EndAll { yes: true })));
}

#[test]
fn parses_jobs_command() {
    let cli = Cli::try_parse_from(["pricedrop-cli", "jobs"]).unwrap();
    assert!(matches!(cli.command, Some(Commands::Jobs)));
}

#[test]
fn no_command_is_none() {
    let cli = Cli::try_parse_from(["pricedrop-cli"]).expect("expected valid cli args");
    assert!(cli.command.is_none());
}

#[test]
fn unknown_command_is_rejected() {
    assert!(Cli::try_parse_from(["pricedrop-cli", "collect"]).is_err());
}
