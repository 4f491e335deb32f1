use crate::*;
use tank_services::command::HELP;

/// Factory tank: working state is checked before the pump, and a tank at
/// its lower bound has nothing to give.
#[tokio::test]
async fn test_download_refusals_on_factory_tank() -> Result<()> {
    let server = start_server(1);
    let mut tank = connect(&server, 0).await?;

    assert_eq!(send(&mut tank, "download 50").await?, "oil tank not working");

    expect_success(&mut tank, &["set working state work"]).await?;
    assert_eq!(send(&mut tank, "download 50").await?, "loading pump not active");

    expect_success(&mut tank, &["set loading pump status active"]).await?;
    assert_eq!(
        send(&mut tank, "download 50").await?,
        "too low level of oil in the tank, it is impossible to download"
    );
    assert_eq!(send(&mut tank, "get level of oil products").await?, "10");

    disconnect(tank).await?;
    Ok(())
}

/// Unloading to the upper bound switches the unloading pump off.
#[tokio::test]
async fn test_unload_reaches_upper_bound() -> Result<()> {
    let server = start_server(1);
    let mut tank = connect(&server, 0).await?;

    expect_success(
        &mut tank,
        &[
            "set working state work",
            "set unloading pump status active",
            "set level of oil products 510",
        ],
    )
    .await?;

    assert_eq!(send(&mut tank, "unload 600").await?, "success");
    assert_eq!(send(&mut tank, "get level of oil products").await?, "1000");
    assert_eq!(send(&mut tank, "get unloading pump status").await?, "inactive");
    assert_eq!(send(&mut tank, "unload 600").await?, "unloading pump not active");

    expect_success(&mut tank, &["set unloading pump status active"]).await?;
    assert_eq!(
        send(&mut tank, "unload 600").await?,
        "too high level of oil in the tank, it is impossible to unload"
    );

    disconnect(tank).await?;
    Ok(())
}

#[tokio::test]
async fn test_download_then_unload_restores_level() -> Result<()> {
    let server = start_server(1);
    let mut tank = connect(&server, 0).await?;

    expect_success(
        &mut tank,
        &[
            "set working state work",
            "set loading pump status active",
            "set unloading pump status active",
            "set level of oil products 640",
            "download 200",
        ],
    )
    .await?;
    assert_eq!(send(&mut tank, "get level of oil products").await?, "440");

    expect_success(&mut tank, &["unload 200"]).await?;
    assert_eq!(send(&mut tank, "get level of oil products").await?, "640");

    disconnect(tank).await?;
    Ok(())
}

/// Unknown and malformed commands are answered and change nothing.
#[tokio::test]
async fn test_unrecognized_and_invalid_commands() -> Result<()> {
    let server = start_server(1);
    let mut tank = connect(&server, 0).await?;

    assert_eq!(send(&mut tank, "open the valve").await?, "unknow command");
    assert_eq!(send(&mut tank, "set working state idle").await?, "unknow command");
    let reply = send(&mut tank, "set download speed 0").await?;
    assert!(reply.starts_with("invalid argument:"), "got {reply:?}");

    assert_eq!(send(&mut tank, "get working state").await?, "non-work");
    assert_eq!(send(&mut tank, "get download speed").await?, "100");
    assert_eq!(send(&mut tank, "get level of oil products").await?, "10");

    disconnect(tank).await?;
    Ok(())
}

#[tokio::test]
async fn test_help_lists_commands() -> Result<()> {
    let server = start_server(1);
    let mut tank = connect(&server, 0).await?;

    let help = send(&mut tank, "help").await?;
    assert_eq!(help, HELP);
    assert!(help.contains("download <quantity of oil products (number)>"));

    disconnect(tank).await?;
    Ok(())
}

/// Settings survive the session that made them.
#[tokio::test]
async fn test_tank_state_outlives_session() -> Result<()> {
    let server = start_server(1);

    let mut first = connect(&server, 0).await?;
    expect_success(
        &mut first,
        &[
            "set lower permissible level 50",
            "set upper acceptable level 900",
            "set loading pump status active",
        ],
    )
    .await?;
    disconnect(first).await?;

    let mut second = connect(&server, 0).await?;
    assert_eq!(send(&mut second, "get lower permissible level").await?, "50");
    assert_eq!(send(&mut second, "get upper acceptable level").await?, "900");
    assert_eq!(send(&mut second, "get loading pump status").await?, "active");
    disconnect(second).await?;
    Ok(())
}
