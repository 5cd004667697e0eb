use color_eyre::Result;

/// Installs the `color-eyre` report hook and a panic hook.
///
/// Release builds write a crash report through `human-panic`; debug builds print a full
/// backtrace with `better-panic`. The hook only reports: unwinding continues afterwards, so a
/// panic caught by the collection scheduler stays a failed result and a panic on the main task
/// still ends the process.
pub fn init_errors() -> Result<()> {
    let builder = color_eyre::config::HookBuilder::default()
        .panic_section(format!(
            "This is a bug. Consider reporting it to the {} developers.",
            env!("CARGO_PKG_NAME")
        ))
        .capture_span_trace_by_default(false)
        .display_location_section(false)
        .display_env_section(false);

    #[cfg(not(debug_assertions))]
    let (panic_hook, eyre_hook) = builder.into_hooks();
    #[cfg(debug_assertions)]
    let (_, eyre_hook) = builder.into_hooks();
    eyre_hook.install()?;

    std::panic::set_hook(Box::new(move |panic_info| {
        error!(%panic_info, "panic");

        #[cfg(not(debug_assertions))]
        {
            use human_panic::{
                handle_dump,
                print_msg,
                Metadata,
            };
            let metadata = Metadata::new(env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"))
                .authors(env!("CARGO_PKG_AUTHORS").replace(':', ", "));
            let file_path = handle_dump(&metadata, panic_info);
            if let Err(err) = print_msg(file_path, &metadata) {
                eprintln!("failed to print the crash report: {err}");
            }
            eprintln!("{}", panic_hook.panic_report(panic_info));
        }

        #[cfg(debug_assertions)]
        better_panic::Settings::auto()
            .most_recent_first(false)
            .lineno_suffix(true)
            .verbosity(better_panic::Verbosity::Full)
            .create_panic_handler()(panic_info);
    }));
    Ok(())
}
