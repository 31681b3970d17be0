use clap::{Parser, Subcommand};
use interprocess::local_socket::{tokio::Stream, traits::tokio::Stream as _};
use log::debug;
use patrol_test_shared::{TestingRequest, TestingResponse, get_socket_name, prelude::*};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use uuid::Uuid;

#[derive(Parser)]
struct Cli {
    /// Name of the local socket the test daemon is listening on
    socket: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Move the device to the given coordinates
    #[command(allow_negative_numbers = true)]
    Position {
        /// Latitude in degrees
        lat: f64,
        /// Longitude in degrees
        long: f64,
    },
    /// Forget the device position
    ClearPosition,
    /// Try to verify a point of the active patrol
    Verify {
        /// ID of the point
        point: Uuid,
    },
    /// End the patrol early
    End {
        /// Say yes to the confirmation dialog
        #[arg(long)]
        confirm: bool,
    },
    /// Turn test mode on or off
    ToggleTestMode,
    /// Print the current state of the screen
    State,
    /// Wait for the next state update from the screen
    NextTick,
    /// Close the screen
    Unmount,
}

impl From<Commands> for TestingRequest {
    fn from(value: Commands) -> Self {
        match value {
            Commands::Position { lat, long } => TestingRequest::SetPosition { lat, long },
            Commands::ClearPosition => TestingRequest::ClearPosition,
            Commands::Verify { point } => TestingRequest::VerifyPoint(point),
            Commands::End { confirm } => TestingRequest::EndPatrol { confirm },
            Commands::ToggleTestMode => TestingRequest::ToggleTestMode,
            Commands::State => TestingRequest::GetState,
            Commands::NextTick => TestingRequest::NextTick,
            Commands::Unmount => TestingRequest::Unmount,
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result {
    colog::init();

    let cli = Cli::parse();

    let socket_name = get_socket_name(cli.socket.clone()).context("Failed to get socket name")?;

    let stream = Stream::connect(socket_name)
        .await
        .context("Failed to connect to socket")?;

    let req = TestingRequest::from(cli.command);
    debug!("Sending {req:?}");
    let mut encoded = serde_json::to_vec(&req).context("Failed to encode request")?;
    encoded.push(b'\n');

    let mut send = &stream;
    send.write_all(&encoded)
        .await
        .context("Failed to send request")?;

    let mut recv = BufReader::new(&stream);
    let mut buffer = String::with_capacity(256);

    loop {
        buffer.clear();
        let read = recv
            .read_line(&mut buffer)
            .await
            .context("Failed to read response")?;
        if read == 0 {
            bail!("Daemon closed the connection before replying");
        }

        let resp = serde_json::from_str::<TestingResponse>(&buffer)
            .context("Failed to parse response")?;
        println!(
            "{}",
            serde_json::to_string_pretty(&resp).context("Failed to format response")?
        );

        if resp.is_reply() {
            break;
        }
    }

    Ok(())
}
