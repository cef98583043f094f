//! Render an error template through the same path the parser's error slot
//! takes, and print what the host would receive.

use std::{
    cell::Cell,
    ffi::{CStr, c_char, c_void},
    process::ExitCode,
    ptr::null_mut,
};

use anyhow::{Context, bail};
use clap::Parser;
use saxbridge::{
    encoding::CharEncoding,
    format::FormatArg,
    globals::set_host_error_handler,
    html::{HtmlParserOptions, HtmlSaxHandler, html_parser_set_error_handler},
    memory::{mem_blocks, mem_free, mem_malloc, mem_reset, mem_setup},
};

#[derive(clap::Parser, Debug)]
#[command(
    version,
    name = "saxfmt",
    about = "Render a printf-style error template the way the parser's error slot does.",
    arg_required_else_help = true
)]
struct CmdArgs {
    /// printf-style template, e.g. 'Invalid tag at line %d'
    template: Option<String>,
    /// arguments; bare values are taken as integers, then floats, then
    /// strings. Force a type with i:, u:, f:, c: or s:, or pass 'null' for
    /// an absent string
    #[arg(allow_hyphen_values = true)]
    args: Vec<String>,
    /// call the error slot with a NULL context
    #[arg(long)]
    null_context: bool,
    /// make the message buffer allocation fail
    #[arg(long)]
    fail_alloc: bool,
    /// report allocator block counts after forwarding
    #[arg(long)]
    memory: bool,
    /// print the mask for comma separated option names (recover, nodefdtd,
    /// noerror, nowarning, pedantic, noblanks, nonet, noimplied, compact,
    /// ignoreenc, default)
    #[arg(long, value_name = "FLAGS")]
    options: Option<String>,
    /// print the parser's identifier for an encoding label
    #[arg(long, value_name = "LABEL")]
    encoding: Option<String>,
}

thread_local! {
    static FORWARDED: Cell<usize> = const { Cell::new(0) };
}

unsafe extern "C" fn print_message(_ctx: *mut c_void, msg: *const c_char) {
    let msg = unsafe { CStr::from_ptr(msg) };
    println!("{}", msg.to_string_lossy());
    FORWARDED.set(FORWARDED.get() + 1);
}

unsafe extern "C" fn refuse_malloc(_size: usize) -> *mut c_void {
    null_mut()
}

fn parse_options(names: &str) -> anyhow::Result<HtmlParserOptions> {
    let mut options = HtmlParserOptions::empty();
    for name in names.split(',').map(str::trim).filter(|name| !name.is_empty()) {
        options |= match name.to_ascii_lowercase().as_str() {
            "recover" => HtmlParserOptions::RECOVER,
            "nodefdtd" => HtmlParserOptions::NO_DEFAULT_DTD,
            "noerror" => HtmlParserOptions::NO_ERROR,
            "nowarning" => HtmlParserOptions::NO_WARNING,
            "pedantic" => HtmlParserOptions::PEDANTIC,
            "noblanks" => HtmlParserOptions::NO_BLANKS,
            "nonet" => HtmlParserOptions::NO_NET,
            "noimplied" => HtmlParserOptions::NO_IMPLIED,
            "compact" => HtmlParserOptions::COMPACT,
            "ignoreenc" => HtmlParserOptions::IGNORE_ENCODING,
            "default" => HtmlParserOptions::default(),
            _ => bail!("unknown option '{name}'"),
        };
    }
    Ok(options)
}

fn parse_arg(arg: &str) -> anyhow::Result<FormatArg<'_>> {
    if arg == "null" {
        return Ok(FormatArg::Str(None));
    }
    let arg = match arg.split_once(':') {
        Some(("i", value)) => {
            let value = value
                .parse()
                .with_context(|| format!("'{value}' is not an integer"))?;
            return Ok(FormatArg::Int(value));
        }
        Some(("u", value)) => {
            let value = value
                .parse()
                .with_context(|| format!("'{value}' is not an unsigned integer"))?;
            return Ok(FormatArg::UInt(value));
        }
        Some(("f", value)) => {
            let value = value
                .parse()
                .with_context(|| format!("'{value}' is not a number"))?;
            return Ok(FormatArg::Double(value));
        }
        Some(("c", value)) => {
            let mut chars = value.chars();
            let (Some(c), None) = (chars.next(), chars.next()) else {
                bail!("'{value}' is not a single character");
            };
            return Ok(FormatArg::Char(c));
        }
        Some(("s", value)) => return Ok(FormatArg::Str(Some(value))),
        _ => arg,
    };
    if let Ok(value) = arg.parse::<i64>() {
        Ok(FormatArg::Int(value))
    } else if let Ok(value) = arg.parse::<f64>() {
        Ok(FormatArg::Double(value))
    } else {
        Ok(FormatArg::Str(Some(arg)))
    }
}

fn run(cmd_args: &CmdArgs) -> anyhow::Result<ExitCode> {
    if let Some(names) = cmd_args.options.as_deref() {
        let options = parse_options(names)?;
        println!("{:#010x}", options.bits());
    }
    if let Some(label) = cmd_args.encoding.as_deref() {
        let encoding = CharEncoding::from_label(label);
        println!(
            "{} ({})",
            i32::from(encoding),
            encoding.get_name().unwrap_or("none")
        );
    }
    let Some(template) = cmd_args.template.as_deref() else {
        return Ok(ExitCode::SUCCESS);
    };
    let args = cmd_args
        .args
        .iter()
        .map(|arg| parse_arg(arg))
        .collect::<anyhow::Result<Vec<_>>>()?;

    let mut sax = HtmlSaxHandler::sax2();
    html_parser_set_error_handler(Some(&mut sax));
    let Some(error) = sax.error else {
        bail!("error slot was not installed");
    };

    set_host_error_handler(Some(print_message));
    if cmd_args.fail_alloc {
        mem_setup(Some(mem_free), Some(refuse_malloc))?;
    } else {
        mem_setup(Some(mem_free), Some(mem_malloc))?;
    }
    let mut token = 0u8;
    let ctx = if cmd_args.null_context {
        null_mut()
    } else {
        &raw mut token as *mut c_void
    };
    unsafe { error(ctx, template, &args) };
    mem_reset();
    set_host_error_handler(None);

    if cmd_args.memory {
        eprintln!("live blocks after forwarding: {}", mem_blocks());
    }
    if FORWARDED.get() == 0 {
        eprintln!("nothing was forwarded");
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}

fn main() -> anyhow::Result<ExitCode> {
    let cmd_args = CmdArgs::parse();
    run(&cmd_args)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn argument_inference() {
        assert!(matches!(parse_arg("42").unwrap(), FormatArg::Int(42)));
        assert!(matches!(parse_arg("-1.5").unwrap(), FormatArg::Double(v) if v == -1.5));
        assert!(matches!(parse_arg("blink").unwrap(), FormatArg::Str(Some("blink"))));
        assert!(matches!(parse_arg("s:42").unwrap(), FormatArg::Str(Some("42"))));
        assert!(matches!(parse_arg("u:7").unwrap(), FormatArg::UInt(7)));
        assert!(matches!(parse_arg("c:x").unwrap(), FormatArg::Char('x')));
        assert!(matches!(parse_arg("null").unwrap(), FormatArg::Str(None)));
        assert!(parse_arg("c:xy").is_err());
        assert!(parse_arg("i:x").is_err());
    }

    #[test]
    fn option_names() {
        assert_eq!(
            parse_options("recover, nonet").unwrap(),
            HtmlParserOptions::RECOVER | HtmlParserOptions::NO_NET
        );
        assert_eq!(parse_options("default").unwrap(), HtmlParserOptions::default());
        assert!(parse_options("huge").is_err());
    }
}
