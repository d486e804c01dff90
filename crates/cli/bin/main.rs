use yansi::Paint;

fn main() {
    if let Err(err) = trontrust_cli::args::run() {
        eprintln!("{} {err:?}", "Error:".red().bold());
        std::process::exit(1);
    }
}
