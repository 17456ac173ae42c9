use std::io::Write as _;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};

use spotter_core::{
    create_backend, logger, CorrelationMatcher, DisplayRegistry, FindFailedResponse, Location,
    Matcher, ObserveEvent, PromptHandler, Rect, Region, Settings, StubMatcher,
};

const USAGE: &str = "\
usage: spotter [options] <command> [args]

commands:
  screens                     list attached displays
  find <image>                find the image, print the match
  wait <image> <secs>         wait for the image to appear
  exists <image> [secs]       probe for the image, never fails
  vanish <image> <secs>       wait for the image to disappear
  click <image | x,y>         click the image or point
  type <text>                 type text at the current focus
  watch <secs> [--appear <image>] [--vanish <image>] [--change [pixels]]
                              observe the region and print events

options:
  --stub                      log actions instead of touching the desktop
  --verbose                   enable debug logging
  --region x,y,w,h            restrict to a rectangle (default: primary screen)
  --similar <0..1>            minimum similarity for image targets
  --on-fail <abort|skip|retry|prompt>
                              what to do when a find comes up empty
";

struct Args {
    stub: bool,
    verbose: bool,
    region: Option<Rect>,
    similar: Option<f64>,
    on_fail: Option<FindFailedResponse>,
    command: String,
    rest: Vec<String>,
}

fn parse_args() -> Result<Args> {
    let mut args = std::env::args().skip(1);
    let mut out = Args {
        stub: false,
        verbose: false,
        region: None,
        similar: None,
        on_fail: None,
        command: String::new(),
        rest: Vec::new(),
    };
    while let Some(a) = args.next() {
        match a.as_str() {
            "--stub" => out.stub = true,
            "--verbose" => out.verbose = true,
            "--region" => {
                let v = args.next().context("--region needs x,y,w,h")?;
                out.region = Some(parse_rect(&v)?);
            }
            "--similar" => {
                let v = args.next().context("--similar needs a value")?;
                out.similar = Some(v.parse().context("--similar: not a number")?);
            }
            "--on-fail" => {
                let v = args.next().context("--on-fail needs a policy")?;
                out.on_fail = Some(match v.as_str() {
                    "abort" => FindFailedResponse::Abort,
                    "skip" => FindFailedResponse::Skip,
                    "retry" => FindFailedResponse::Retry,
                    "prompt" => FindFailedResponse::Prompt,
                    other => bail!("unknown --on-fail policy '{}'", other),
                });
            }
            "--help" | "-h" => {
                print!("{}", USAGE);
                std::process::exit(0);
            }
            _ if out.command.is_empty() => out.command = a,
            _ => out.rest.push(a),
        }
    }
    if out.command.is_empty() {
        bail!("no command given\n\n{}", USAGE);
    }
    Ok(out)
}

fn parse_rect(s: &str) -> Result<Rect> {
    let parts: Vec<i32> = s
        .split(',')
        .map(|p| p.trim().parse::<i32>())
        .collect::<std::result::Result<_, _>>()
        .with_context(|| format!("bad rectangle '{}'", s))?;
    if parts.len() != 4 {
        bail!("bad rectangle '{}', expected x,y,w,h", s);
    }
    Ok(Rect::new(parts[0], parts[1], parts[2], parts[3]))
}

fn parse_point(s: &str) -> Option<Location> {
    let (x, y) = s.split_once(',')?;
    Some(Location::new(x.trim().parse().ok()?, y.trim().parse().ok()?))
}

/// Asks on the terminal what to do about a failed find.
struct TerminalPrompt;

impl PromptHandler for TerminalPrompt {
    fn ask(&self, target: &str) -> FindFailedResponse {
        print!("cannot find {} - [a]bort, [s]kip, [r]etry? ", target);
        std::io::stdout().flush().ok();
        let mut line = String::new();
        if std::io::stdin().read_line(&mut line).is_err() {
            return FindFailedResponse::Abort;
        }
        // settle time before the next capture
        std::thread::sleep(std::time::Duration::from_millis(500));
        match line.trim() {
            "s" | "skip" => FindFailedResponse::Skip,
            "r" | "retry" => FindFailedResponse::Retry,
            _ => FindFailedResponse::Abort,
        }
    }
}

fn main() -> Result<()> {
    let args = parse_args()?;

    let logs_dir = {
        let mut d = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        d.push("logs");
        d
    };
    logger::init(&logs_dir);
    logger::set_verbose(args.verbose);

    let settings_path = std::env::current_dir()
        .unwrap_or_else(|_| PathBuf::from("."))
        .join("settings.json");
    let mut settings = Settings::load(&settings_path);
    if let Some(s) = args.similar {
        settings.min_similarity = s;
    }

    let (screen_backend, input_backend) = create_backend(args.stub);
    let matcher: Arc<dyn Matcher> = if args.stub {
        Arc::new(StubMatcher::new())
    } else {
        Arc::new(CorrelationMatcher::new())
    };
    let registry = DisplayRegistry::new(screen_backend, input_backend, matcher, settings);

    logger::info(&format!("spotter started, command: {}", args.command));

    let mut region = match args.region {
        Some(r) => Region::new(r, registry.clone()),
        None => registry.primary_screen().region(),
    };
    region.set_prompt_handler(Arc::new(TerminalPrompt));
    if let Some(policy) = args.on_fail {
        region.set_find_failed_response(policy);
    }

    match args.command.as_str() {
        "screens" => {
            registry.show_screens();
            for i in 0..registry.display_count() {
                let s = registry.screen(i);
                let marker = if s.is_primary() { " primary" } else { "" };
                println!("screen {}: {}{}", i, s.bounds(), marker);
            }
        }
        "find" => {
            let image = args.rest.first().context("find needs an image")?;
            match region.find(image.as_str())? {
                Some(m) => println!("{}", m),
                None => println!("not found (skipped)"),
            }
        }
        "wait" => {
            let image = args.rest.first().context("wait needs an image")?;
            let secs: f64 = args
                .rest
                .get(1)
                .context("wait needs a timeout")?
                .parse()
                .context("wait: bad timeout")?;
            match region.wait(image.as_str(), secs)? {
                Some(m) => println!("{}", m),
                None => println!("not found (skipped)"),
            }
        }
        "exists" => {
            let image = args.rest.first().context("exists needs an image")?;
            let secs: f64 = match args.rest.get(1) {
                Some(v) => v.parse().context("exists: bad timeout")?,
                None => 0.0,
            };
            match region.exists(image.as_str(), secs) {
                Some(m) => println!("{}", m),
                None => {
                    println!("not found");
                    std::process::exit(1);
                }
            }
        }
        "vanish" => {
            let image = args.rest.first().context("vanish needs an image")?;
            let secs: f64 = args
                .rest
                .get(1)
                .context("vanish needs a timeout")?
                .parse()
                .context("vanish: bad timeout")?;
            if region.wait_vanish(image.as_str(), secs) {
                println!("vanished");
            } else {
                println!("still there");
                std::process::exit(1);
            }
        }
        "click" => {
            let target = args.rest.first().context("click needs a target")?;
            let clicked = match parse_point(target) {
                Some(p) => region.click(p)?,
                None => region.click(target.as_str())?,
            };
            if !clicked {
                println!("not found (skipped)");
            }
        }
        "type" => {
            let text = args.rest.join(" ");
            region.type_text(None, &text)?;
        }
        "watch" => {
            let secs: f64 = args
                .rest
                .first()
                .context("watch needs a duration")?
                .parse()
                .context("watch: bad duration")?;
            let mut it = args.rest.iter().skip(1).peekable();
            let mut any = false;
            while let Some(flag) = it.next() {
                match flag.as_str() {
                    "--appear" => {
                        let img = it.next().context("--appear needs an image")?;
                        region.on_appear(img.as_str(), Box::new(on_event));
                        any = true;
                    }
                    "--vanish" => {
                        let img = it.next().context("--vanish needs an image")?;
                        region.on_vanish(img.as_str(), Box::new(on_event));
                        any = true;
                    }
                    "--change" => {
                        match it.peek().and_then(|v| v.parse::<u32>().ok()) {
                            Some(px) => {
                                it.next();
                                region.on_change_min(px, Box::new(on_event));
                            }
                            None => region.on_change(Box::new(on_event)),
                        }
                        any = true;
                    }
                    other => bail!("unknown watch option '{}'", other),
                }
            }
            if !any {
                bail!("watch needs at least one of --appear, --vanish, --change");
            }
            region.observe(secs);
        }
        other => bail!("unknown command '{}'\n\n{}", other, USAGE),
    }
    Ok(())
}

fn on_event(event: &ObserveEvent) {
    match event {
        ObserveEvent::Appear { target, matched, .. } => {
            println!("appear {} at {}", target, matched.rect);
        }
        ObserveEvent::Vanish { target, last_match, .. } => match last_match {
            Some(m) => println!("vanish {} last seen at {}", target, m.rect),
            None => println!("vanish {} (never seen)", target),
        },
        ObserveEvent::Change { changes, .. } => {
            println!(
                "change: {} area(s), largest {}",
                changes.len(),
                changes.iter().max_by_key(|r| r.area()).map(|r| r.to_string()).unwrap_or_default()
            );
        }
    }
}
