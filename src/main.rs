fn main() -> ramgen::Result<()> {
    ramgen::cli::run()
}
