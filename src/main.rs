use clap::Parser;
use verivoice::cli::{Cli, Command, read_pairs_file};
use verivoice::model::{
    AudioAsset, ConversionRequest, EngineReport, ValidationReport, VerificationResult,
    VerificationStatus,
};
use verivoice::orchestrator::VoiceVerifier;
use verivoice::{VvError, VvResult};

fn main() {
    let cli = Cli::parse();
    verivoice::logging::init(cli.verbose);

    if let Err(error) = run(cli) {
        eprintln!("error: {error}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> VvResult<()> {
    match cli.command {
        Command::Verify(args) => {
            let verifier = VoiceVerifier::new(args.to_config())?;

            if args.info {
                let report = verifier.info();
                if args.json {
                    println!("{}", serde_json::to_string_pretty(&report)?);
                } else {
                    print_engine_report(&report);
                }
                return Ok(());
            }

            let (reference, candidate) = args.pair()?;
            let result = verifier.verify_pair(reference, candidate)?;
            if args.json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                print_verification_result(&result);
            }
            Ok(())
        }
        Command::Batch(args) => {
            let pairs = read_pairs_file(&args.pairs_file)?;
            let verifier = VoiceVerifier::new(args.to_config())?;
            let results = verifier.verify_batch(&pairs);

            if args.json {
                println!("{}", serde_json::to_string_pretty(&results)?);
            } else {
                for (index, result) in results.iter().enumerate() {
                    println!("{}. {}", index + 1, summarize_result(result));
                }
                let matched = results
                    .iter()
                    .filter(|r| r.verification_status == VerificationStatus::Succeeded)
                    .count();
                println!("{} pairs, {matched} matched", results.len());
            }
            Ok(())
        }
        Command::Convert(args) => {
            args.check()?;
            let options = args.to_options();

            // Single file without a target directory keeps the fail-fast
            // path; everything else goes through the batch runner.
            if args.inputs.len() == 1 && args.output_dir.is_none() {
                let request = ConversionRequest::with_options(
                    args.inputs[0].clone(),
                    args.output.clone(),
                    &options,
                );
                let destination = verivoice::convert::convert_file(&request)?;
                if args.json {
                    let entry = serde_json::json!({
                        "source": args.inputs[0],
                        "destination": destination,
                    });
                    println!("{}", serde_json::to_string_pretty(&entry)?);
                } else {
                    println!("{}", destination.display());
                }
                return Ok(());
            }

            let entries = verivoice::convert::convert_batch(
                &args.inputs,
                args.output_dir.as_deref(),
                &options,
            )?;
            if args.json {
                println!("{}", serde_json::to_string_pretty(&entries)?);
            } else {
                for entry in &entries {
                    match &entry.destination {
                        Some(destination) => {
                            println!("{} -> {}", entry.source.display(), destination.display());
                        }
                        None => {
                            let reason =
                                entry.error_message.as_deref().unwrap_or("unknown failure");
                            println!("{} -> failed: {reason}", entry.source.display());
                        }
                    }
                }
            }

            let failed = entries.iter().filter(|e| e.destination.is_none()).count();
            if failed > 0 {
                return Err(VvError::ConversionFailed(format!(
                    "{failed} of {} conversions failed",
                    entries.len()
                )));
            }
            Ok(())
        }
        Command::Validate(args) => {
            // A file ffprobe cannot read becomes an invalid entry; the rest
            // of the batch still gets its report.
            let mut outcomes = Vec::with_capacity(args.inputs.len());
            for input in &args.inputs {
                outcomes.push((input, verivoice::probe::validate(input)));
            }

            if args.json {
                let mut entries = Vec::with_capacity(outcomes.len());
                for (input, outcome) in &outcomes {
                    match outcome {
                        Ok(report) => entries.push(serde_json::to_value(report)?),
                        Err(error) => entries.push(serde_json::json!({
                            "path": input,
                            "is_valid": false,
                            "errors": [error.to_string()],
                            "warnings": [],
                        })),
                    }
                }
                println!("{}", serde_json::to_string_pretty(&entries)?);
            } else {
                for (input, outcome) in &outcomes {
                    match outcome {
                        Ok(report) => print_validation_report(report),
                        Err(error) => {
                            println!("{}: invalid", input.display());
                            println!("  error: {error}");
                        }
                    }
                }
            }

            let failed = outcomes.iter().filter(|(_, outcome)| outcome.is_err()).count();
            if failed > 0 {
                return Err(VvError::ProbeFailed(format!(
                    "{failed} of {} files could not be probed",
                    outcomes.len()
                )));
            }
            Ok(())
        }
        Command::Probe(args) => {
            let asset = verivoice::probe::probe(&args.input)?;
            if args.json {
                println!("{}", serde_json::to_string_pretty(&asset)?);
            } else {
                print_audio_asset(&asset);
            }
            Ok(())
        }
    }
}

fn print_verification_result(result: &VerificationResult) {
    println!("status: {}", result.verification_status.as_str());
    match result.score {
        Some(score) => println!("score: {score} (threshold {})", result.threshold),
        None => println!("score: none (threshold {})", result.threshold),
    }
    println!("confidence: {}", result.confidence_level.as_str());
    println!("far: {}%", result.far_percentage);
    if let Some(message) = &result.error_message {
        println!("error: {message}");
    }
}

fn summarize_result(result: &VerificationResult) -> String {
    let score = result
        .score
        .map_or_else(|| "-".to_owned(), |score| score.to_string());
    format!(
        "{} vs {}: {} (score {score})",
        result.reference_file,
        result.candidate_file,
        result.verification_status.as_str()
    )
}

fn print_engine_report(report: &EngineReport) {
    println!("sdk root: {}", report.sdk_root);
    println!("engine: {}", report.engine.as_str());
    let binary_state = if report.binary_exists {
        "found"
    } else {
        "missing"
    };
    println!("binary: {} ({binary_state})", report.engine_binary);
    match &report.library_path {
        Some(path) => println!("libraries: {path}"),
        None => println!("libraries: missing"),
    }
    println!(
        "threshold: {} (FAR {}%)",
        report.threshold, report.far_percentage
    );
}

fn print_validation_report(report: &ValidationReport) {
    let verdict = if report.is_valid { "ok" } else { "invalid" };
    println!("{}: {verdict}", report.asset.path.display());
    for error in &report.errors {
        println!("  error: {error}");
    }
    for warning in &report.warnings {
        println!("  warning: {warning}");
    }
}

fn print_audio_asset(asset: &AudioAsset) {
    println!("path: {}", asset.path.display());
    println!("duration: {:.2}s", asset.duration_seconds);
    println!("sample rate: {} Hz", asset.sample_rate_hz);
    println!("channels: {}", asset.channels);
    println!("codec: {}", asset.codec_name);
    println!("bit rate: {} b/s", asset.bit_rate);
    println!("size: {} bytes", asset.container_size_bytes);
}
