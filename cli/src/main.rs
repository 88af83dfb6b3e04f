//! Issue USB suspend and resume commands to devices selected by product/vendor id.

use std::{ffi::OsString, io::Write, process::ExitCode};

use clap::{CommandFactory, Parser};
use tracing::{debug, Level};
use tracing_subscriber::EnvFilter;
use usb_power::{
    ids::{parse_product_id, parse_vendor_id, InvalidAction},
    power::TransitionOutcome,
    Error, IdPair, PowerAction,
};

/// Every failure reads as -1 from a shell.
const EXIT_FAILURE: u8 = 255;
/// The host could not allocate the matching criterion.
const EXIT_NO_RESOURCES: u8 = 254;

const USAGE: &str = "usbpower suspend <product id> <vendor id>
       usbpower resume <product id> <vendor id>";

const AFTER_HELP: &str = "Vendor and product IDs can be obtained by running the command:
  system_profiler SPUSBDataType

They must be given as four-digit hexadecimal numbers beginning with 0x
(as shown by the above command).

Example:
  usbpower suspend 0x0040 0x045e

Copyright 2009 Samuel Marshall - http://www.leafdigital.com/software/
Released under Gnu Public License v3.";

#[derive(Parser, Debug)]
#[command(name = "usbpower")]
#[command(about = "Issue USB suspend and resume commands", long_about = None)]
#[command(disable_help_flag = true, disable_version_flag = true)]
#[command(override_usage = USAGE, after_help = AFTER_HELP)]
struct Cli {
    /// suspend or resume
    #[arg(value_parser = parse_action)]
    action: PowerAction,

    /// Product id, e.g. 0x0040
    #[arg(value_parser = parse_product_id)]
    product_id: u16,

    /// Vendor id, e.g. 0x045e
    #[arg(value_parser = parse_vendor_id)]
    vendor_id: u16,
}

fn parse_action(s: &str) -> Result<PowerAction, InvalidAction> {
    s.parse()
}

impl Cli {
    /// Returns `Ok(None)` unless there are exactly three arguments after the
    /// program name; that case shows the usage text and is not an error.
    fn try_parse_args<I, T>(args: I) -> Result<Option<Self>, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString>,
    {
        let args: Vec<OsString> = args.into_iter().map(Into::into).collect();
        if args.len() != 4 {
            return Ok(None);
        }
        Self::try_parse_from(args).map(Some)
    }

    fn ids(&self) -> IdPair {
        IdPair::new(self.vendor_id, self.product_id)
    }
}

#[cfg(target_os = "macos")]
fn transition(ids: IdPair, action: PowerAction) -> Result<TransitionOutcome, Error> {
    let host = usb_power::iokit::IoKitHost::open()?;
    usb_power::power::apply(&host, ids, action)
}

#[cfg(not(target_os = "macos"))]
fn transition(_ids: IdPair, _action: PowerAction) -> Result<TransitionOutcome, Error> {
    Err(Error::UnsupportedPlatform(std::env::consts::OS))
}

fn exit_status(err: &Error) -> u8 {
    match err {
        Error::Construction(_) => EXIT_NO_RESOURCES,
        _ => EXIT_FAILURE,
    }
}

fn report_invalid_args(err: &clap::Error, out: &mut impl Write) -> std::io::Result<()> {
    write!(out, "{}", err.render())
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::builder()
                .with_env_var("RUST_LOG")
                .with_default_directive(Level::INFO.into())
                .from_env_lossy(),
        )
        .init();

    let cli = match Cli::try_parse_args(std::env::args_os()) {
        Ok(Some(cli)) => cli,
        Ok(None) => {
            if let Err(e) = Cli::command().print_help() {
                eprintln!("Failed to print usage: {e}");
                return ExitCode::from(EXIT_FAILURE);
            }
            return ExitCode::SUCCESS;
        }
        Err(e) => {
            if let Err(io) = report_invalid_args(&e, &mut std::io::stderr()) {
                eprintln!("Failed to report invalid arguments: {io}");
            }
            return ExitCode::from(EXIT_FAILURE);
        }
    };

    match transition(cli.ids(), cli.action) {
        Ok(outcome) => {
            debug!(?outcome, "finished");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("{e}");
            ExitCode::from(exit_status(&e))
        }
    }
}

#[cfg(test)]
mod tests {
    use clap::error::ErrorKind;
    use usb_power::error::{ConstructionStep, HostOp};

    use super::*;

    #[test]
    fn command_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn wrong_argument_count_is_help() {
        for args in [
            vec!["usbpower"],
            vec!["usbpower", "--help"],
            vec!["usbpower", "suspend", "0x0040"],
            vec!["usbpower", "suspend", "0x0040", "0x045e", "extra"],
        ] {
            assert!(Cli::try_parse_args(args.clone()).unwrap().is_none(), "{args:?}");
        }
    }

    #[test]
    fn parses_suspend_and_resume() {
        let suspend = Cli::try_parse_args(["usbpower", "suspend", "0x0040", "0x045e"])
            .unwrap()
            .unwrap();
        let resume = Cli::try_parse_args(["usbpower", "resume", "0x0040", "0X045E"])
            .unwrap()
            .unwrap();

        assert_eq!(suspend.action, PowerAction::Suspend);
        assert_eq!(resume.action, PowerAction::Resume);
        assert_eq!(suspend.ids(), IdPair::new(0x045e, 0x0040));
        assert_eq!(suspend.ids(), resume.ids());
    }

    #[test]
    fn rejects_unknown_action() {
        let err = Cli::try_parse_args(["usbpower", "sleep", "0x0040", "0x045e"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ValueValidation);
        let message = err.to_string();
        assert!(message.contains("sleep"), "{message}");
        assert!(message.contains("expecting suspend, resume"), "{message}");
    }

    #[test]
    fn rejects_malformed_ids() {
        let err = Cli::try_parse_args(["usbpower", "suspend", "0x040", "0x045e"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ValueValidation);
        let message = err.to_string();
        assert!(message.contains("0x040"), "{message}");
        assert!(message.contains("four-digit hexadecimal e.g. 0x0040"), "{message}");

        let err = Cli::try_parse_args(["usbpower", "resume", "0x0040", "045e"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ValueValidation);
        let message = err.to_string();
        assert!(message.contains("045e"), "{message}");
        assert!(message.contains("four-digit hexadecimal e.g. 0x045e"), "{message}");
    }

    struct BrokenPipe;

    impl Write for BrokenPipe {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Err(std::io::ErrorKind::BrokenPipe.into())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn invalid_args_report_surfaces_write_errors() {
        let err = Cli::try_parse_args(["usbpower", "sleep", "0x0040", "0x045e"]).unwrap_err();

        let mut out = Vec::new();
        report_invalid_args(&err, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("sleep"), "{text}");

        let failed = report_invalid_args(&err, &mut BrokenPipe).unwrap_err();
        assert_eq!(failed.kind(), std::io::ErrorKind::BrokenPipe);
    }

    #[test]
    fn usage_text_explains_ids() {
        let help = Cli::command().render_help().to_string();
        assert!(help.contains("usbpower suspend <product id> <vendor id>"));
        assert!(help.contains("system_profiler SPUSBDataType"));
        assert!(help.contains("usbpower suspend 0x0040 0x045e"));
        assert!(help.contains("Copyright 2009 Samuel Marshall"));
        assert!(help.contains("Released under Gnu Public License v3."));
    }

    #[test]
    fn exit_codes() {
        let not_found = Error::NotFound(IdPair::new(0x045e, 0x0040));
        let host = Error::Host {
            op: HostOp::OpenDevice,
            status: 1,
        };
        let construction = Error::Construction(ConstructionStep::MatchingDictionary);
        assert_eq!(exit_status(&not_found), EXIT_FAILURE);
        assert_eq!(exit_status(&host), EXIT_FAILURE);
        assert_eq!(exit_status(&construction), EXIT_NO_RESOURCES);
    }
}
