use clap::Parser;

use super::*;

#[test]
fn parse_move_accepts_trip_and_pending_destinations() {
    assert_eq!(
        parse_move("12=7").expect("trip move"),
        (OrderId(12), OrderLocation::Trip(shared::domain::TripId(7)))
    );
    assert_eq!(
        parse_move("12=pending").expect("pending move"),
        (OrderId(12), OrderLocation::Pending)
    );
    assert_eq!(
        parse_move(" 3 = trip:9").expect("prefixed trip"),
        (OrderId(3), OrderLocation::Trip(shared::domain::TripId(9)))
    );
}

#[test]
fn parse_move_rejects_malformed_input() {
    assert!(parse_move("12").is_err());
    assert!(parse_move("abc=7").is_err());
    assert!(parse_move("12=somewhere").is_err());
}

#[test]
fn plan_collects_repeated_moves() {
    let cli = Cli::try_parse_from([
        "dispatch",
        "--date",
        "2024-05-01",
        "plan",
        "--move",
        "1=4",
        "--move",
        "2=pending",
    ])
    .expect("parse");
    assert_eq!(cli.date, NaiveDate::from_ymd_opt(2024, 5, 1));
    match cli.command {
        Command::Plan { moves } => assert_eq!(
            moves,
            vec![
                (OrderId(1), OrderLocation::Trip(shared::domain::TripId(4))),
                (OrderId(2), OrderLocation::Pending),
            ]
        ),
        other => panic!("unexpected command {other:?}"),
    }
}

#[test]
fn global_flags_follow_the_subcommand() {
    let cli = Cli::try_parse_from([
        "dispatch",
        "create-trip",
        "--route",
        "North",
        "--driver",
        "3",
        "--api-base",
        "http://dispatch.local:8090/",
        "--token",
        "abc",
    ])
    .expect("parse");
    assert_eq!(cli.api_base.as_deref(), Some("http://dispatch.local:8090/"));
    assert_eq!(cli.token.as_deref(), Some("abc"));
    assert!(matches!(
        cli.command,
        Command::CreateTrip { ref route, driver: 3, loaded_weight: None } if route == "North"
    ));
}

#[test]
fn bad_date_is_rejected_by_the_parser() {
    assert!(Cli::try_parse_from(["dispatch", "--date", "05/01/2024", "board"]).is_err());
}
