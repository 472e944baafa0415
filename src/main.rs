use rvra_lib as rvra;

fn main() {
    let options = rvra::options::get();
    rvra::logger::init(options.verbosity()).expect("Logger initialization failed");

    if let Err(()) = rvra::driver::drive(options) {
        std::process::exit(1);
    }
}
