pub fn print_banner(version: &str) {
    let banner = format!(
        r#"
 ███╗   ██╗███████╗██╗    ██╗███████╗
 ████╗  ██║██╔════╝██║    ██║██╔════╝    newswire
 ██╔██╗ ██║█████╗  ██║ █╗ ██║███████╗    v{}
 ██║╚██╗██║██╔══╝  ██║███╗██║╚════██║
 ██║ ╚████║███████╗╚███╔███╔╝███████║
 ╚═╝  ╚═══╝╚══════╝ ╚══╝╚══╝ ╚══════╝
"#,
        version
    );

    tracing::info!("{}", banner);
}
