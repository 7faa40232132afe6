use schema_audit::ThresholdViolation;

fn main() {
    if let Err(err) = schema_audit::run() {
        if let Some(violation) = err.downcast_ref::<ThresholdViolation>() {
            eprintln!("{violation}");
            std::process::exit(1);
        }
        eprintln!("error: {err:#}");
        std::process::exit(2);
    }
}
