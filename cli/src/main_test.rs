use super::*;

fn parse(args: &[&str]) -> Cli {
    let mut argv = vec!["ari-cli", "--user", "asterisk", "--password", "secret"];
    argv.extend_from_slice(args);
    Cli::try_parse_from(argv).unwrap()
}

#[test]
fn settings_follow_flags() {
    let cli = parse(&["--host", "pbx.local", "--port", "8089", "--tls", "--app", "Demo", "ping"]);
    let settings = cli.settings();

    assert_eq!(settings.host, "pbx.local");
    assert_eq!(settings.port, 8089);
    assert!(settings.tls);
    assert_eq!(settings.app_name, "Demo");
    assert_eq!(settings.rest_base_url(), "https://pbx.local:8089/ari");
}

#[test]
fn info_only_accepts_comma_list() {
    let cli = parse(&["info", "--only", "build,status"]);
    let Command::Info { only } = cli.command else {
        panic!("expected info command");
    };
    let sections: Vec<InfoSection> = only.into_iter().map(InfoSection::from).collect();
    assert_eq!(sections, vec![InfoSection::Build, InfoSection::Status]);
}

#[test]
fn bridges_create_defaults_to_mixing() {
    let cli = parse(&["bridges", "create", "--name", "lobby"]);
    let Command::Bridges(BridgesCommand {
        command: BridgesSubcommand::Create { bridge_type, name },
    }) = cli.command
    else {
        panic!("expected bridges create");
    };
    assert_eq!(bridge_type, vec!["mixing"]);
    assert_eq!(name.as_deref(), Some("lobby"));
}

#[test]
fn channels_hangup_takes_reason() {
    let cli = parse(&["channels", "hangup", "c-1", "--reason", "busy"]);
    let Command::Channels(ChannelsCommand {
        command: ChannelsSubcommand::Hangup { channel_id, reason },
    }) = cli.command
    else {
        panic!("expected channels hangup");
    };
    assert_eq!(channel_id, "c-1");
    assert_eq!(reason.as_deref(), Some("busy"));
}

#[test]
fn missing_credentials_are_rejected() {
    if std::env::var_os("ARI_USER").is_some() {
        return;
    }
    assert!(Cli::try_parse_from(["ari-cli", "ping"]).is_err());
}

#[test]
fn drop_counter_tallies_event_drops_but_not_transport_failures() {
    let dropped = DropCounter::default();
    let handler_side = dropped.clone();

    handler_side.record("StasisStart");
    handler_side.record("unknown");
    handler_side.record(TRANSPORT_MESSAGE_TYPE);

    assert_eq!(dropped.total(), 2);
}
