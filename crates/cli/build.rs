use std::{env, fs, path::PathBuf};

fn main() {
    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-env-changed=OUT_DIR");

    let out_dir = PathBuf::from(env::var("OUT_DIR").unwrap());
    let completions_dir = out_dir.join("completions");

    fs::create_dir_all(&completions_dir).unwrap();

    let mut cmd = clap::Command::new("glimpse")
        .version("1.0.0")
        .author("Glimpse Contributors")
        .about("Summarize links the way the chat bot would")
        .arg(clap::arg!(<INPUT>... "URLs or whole chat lines; '-' reads from stdin"))
        .arg(clap::arg!(--raw "Keep the bold markers instead of rendering them"))
        .arg(clap::arg!(--timeout_ms <MS> "Per-attempt fetch timeout in milliseconds").default_value("1500"))
        .arg(clap::arg!(--retries <NUM> "Attempts for selector-scoped retrieval").default_value("5"))
        .arg(clap::arg!(--user_agent <UA> "Custom User-Agent for non-impersonated requests").value_name("UA"))
        .arg(clap::arg!(--shortcut_domain <HOST> "Host of the bot's own link-shortcut service"))
        .arg(clap::arg!(--bsky_identifier <HANDLE> "Bluesky account used for post lookups and link search"))
        .arg(clap::arg!(--bsky_password <PASSWORD> "Bluesky app password"))
        .arg(clap::arg!(--bsky_service <URL> "Bluesky PDS to log in to").default_value("https://bsky.social"))
        .arg(clap::arg!(--proxy_endpoint <URL> "Render proxy endpoint for pages that need JavaScript"))
        .arg(clap::arg!(--proxy_key <KEY> "Render proxy API key"))
        .arg(clap::arg!(-v --verbose "Enable debug logging"));

    clap_complete::generate_to(clap_complete::shells::Bash, &mut cmd, "glimpse", &completions_dir).unwrap();
    clap_complete::generate_to(clap_complete::shells::Zsh, &mut cmd, "glimpse", &completions_dir).unwrap();
    clap_complete::generate_to(clap_complete::shells::Fish, &mut cmd, "glimpse", &completions_dir).unwrap();
    clap_complete::generate_to(clap_complete::shells::PowerShell, &mut cmd, "glimpse", &completions_dir).unwrap();

    println!("cargo:warning=Shell completions generated in: {}", completions_dir.display());
}
