use anyhow::Context;

pub(crate) struct Args {
    pub join_endpoint: String,
    pub conference_id: String,
    pub access_token: String,
    pub ca_cert_path: Option<String>,
    pub output_dir: String,
    pub enable_participants: bool,
    pub enable_media_entries: bool,
    pub enable_video_assignment: bool,
}

pub(crate) fn parse_args() -> anyhow::Result<Args> {
    let mut join_endpoint = "https://meet.googleapis.com".to_string();
    let mut conference_id = None;
    let mut access_token = None;
    let mut ca_cert_path = None;
    let mut output_dir = "./meet-media-output".to_string();
    let mut enable_participants = false;
    let mut enable_media_entries = false;
    let mut enable_video_assignment = false;

    let args: Vec<String> = std::env::args().collect();
    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "-h" | "--help" => {
                println!("meet-media-demo - sample consumer for meet-media-client");
                println!();
                println!("USAGE:");
                println!("    meet-media-demo [OPTIONS]");
                println!();
                println!("OPTIONS:");
                println!("    --join-endpoint <URL>     Meet join endpoint [default: https://meet.googleapis.com]");
                println!("    --conference-id <ID>      Conference space ID (required)");
                println!("    --access-token <TOKEN>    OAuth bearer token (prefer MEET_ACCESS_TOKEN env)");
                println!("    --ca-cert <PATH>          CA bundle to trust for the join endpoint");
                println!("    --output-dir <PATH>       Where event logs and media dumps are written");
                println!("    --enable-participants     Open the participants data channel");
                println!("    --enable-media-entries    Open the media-entries data channel");
                println!("    --enable-video-assignment Open the video-assignment data channel");
                println!("    -h, --help                Print this help and exit");
                std::process::exit(0);
            }
            "--join-endpoint" => {
                i += 1;
                join_endpoint = args.get(i).context("Missing --join-endpoint value")?.clone();
            }
            "--conference-id" => {
                i += 1;
                conference_id = Some(args.get(i).context("Missing --conference-id value")?.clone());
            }
            "--access-token" => {
                i += 1;
                access_token = Some(args.get(i).context("Missing --access-token value")?.clone());
            }
            "--ca-cert" => {
                i += 1;
                ca_cert_path = Some(args.get(i).context("Missing --ca-cert value")?.clone());
            }
            "--output-dir" => {
                i += 1;
                output_dir = args.get(i).context("Missing --output-dir value")?.clone();
            }
            "--enable-participants" => enable_participants = true,
            "--enable-media-entries" => enable_media_entries = true,
            "--enable-video-assignment" => enable_video_assignment = true,
            other => anyhow::bail!("Unknown argument: {other}"),
        }
        i += 1;
    }

    if access_token.is_none() {
        access_token = std::env::var("MEET_ACCESS_TOKEN").ok();
    }

    Ok(Args {
        join_endpoint,
        conference_id: conference_id.context("--conference-id is required")?,
        access_token: access_token.context("--access-token is required (or set MEET_ACCESS_TOKEN)")?,
        ca_cert_path,
        output_dir,
        enable_participants,
        enable_media_entries,
        enable_video_assignment,
    })
}
