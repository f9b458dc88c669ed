//! One wallet-assembly session: collect cosigners, report rejections, and
//! write the setup once the set is complete.

use anyhow::{Context, Result};
use quorum_cosigner::ur::{is_ur, UrCollector};
use quorum_cosigner::{
    CosignerKey, CosignerParser, CosignerSet, InterchangePayload, Prompt, Prompter,
    WalletAssembler,
};
use quorum_keys::{fingerprint_hex, generate_mnemonic, DerivationCache, ScriptPolicy};
use std::io::{BufRead, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use zeroize::Zeroizing;

use crate::config::CoordinatorConfig;

/// Reads prompt answers from stdin, one per line. EOF cancels.
pub struct StdinPrompter;

impl Prompter for StdinPrompter {
    fn ask(&mut self, prompt: &Prompt) -> Option<String> {
        eprint!("{}: ", prompt);
        std::io::stderr().flush().ok();

        let mut line = String::new();
        match std::io::stdin().lock().read_line(&mut line) {
            Ok(0) | Err(_) => None,
            Ok(_) => Some(line.trim_end_matches(['\r', '\n']).to_string()),
        }
    }
}

/// A freshly generated cosigner. The phrase is shown once and then dropped.
pub struct GeneratedCosigner {
    pub index: usize,
    pub mnemonic: Zeroizing<String>,
    pub payload: InterchangePayload,
}

/// Result of assembling a complete set
#[derive(Debug)]
pub struct Finished {
    pub descriptor: String,
    pub setup: String,
    pub setup_file: PathBuf,
}

pub struct Session {
    label: String,
    policy: ScriptPolicy,
    setup_file: PathBuf,
    cache: Arc<DerivationCache>,
    parser: CosignerParser,
    set: CosignerSet,
    scanner: UrCollector,
}

impl Session {
    pub fn new(config: &CoordinatorConfig) -> Result<Self> {
        let policy = config.policy()?;
        let cache = DerivationCache::shared();
        let parser = CosignerParser::new(policy, Arc::clone(&cache))
            .with_passphrase_prompt(config.coordinator.ask_passphrase);
        let set = CosignerSet::new(config.wallet.m, config.wallet.n, policy, Arc::clone(&cache))?;

        Ok(Self {
            label: config.wallet.label.clone(),
            policy,
            setup_file: config.setup_file(),
            cache,
            parser,
            set,
            scanner: UrCollector::new(),
        })
    }

    pub fn set(&self) -> &CosignerSet {
        &self.set
    }

    /// Generate a new mnemonic cosigner and add it to the set.
    ///
    /// Derivation runs on a blocking worker so the cache is warm before the
    /// key is validated and exported.
    pub async fn generate(&mut self) -> Result<GeneratedCosigner> {
        // Only the zeroizing phrase outlives this block
        let phrase = {
            let mnemonic = generate_mnemonic()?;
            Zeroizing::new(mnemonic.to_string())
        };

        let fingerprint = self.cache.fingerprint_offloaded(phrase.clone(), None).await?;
        self.cache
            .xpub_offloaded(phrase.clone(), self.policy.path(), None)
            .await?;

        let index = self.set.try_add(CosignerKey::from_mnemonic(&phrase, None))?;
        let payload = self.set.export_for(index)?;
        log::info!("Generated cosigner {}", fingerprint_hex(&fingerprint));

        Ok(GeneratedCosigner {
            index,
            mnemonic: phrase,
            payload,
        })
    }

    /// Parse one payload (JSON, key-origin string, mnemonic, or a
    /// `ur:bytes` wrapper of any of these) and add it to the set.
    ///
    /// Parts of an animated `ur:bytes` sequence may come one per call or
    /// several per payload, separated by whitespace. `Ok(None)` means the
    /// sequence is not complete yet.
    pub fn add_payload(&mut self, raw: &str, prompter: &mut dyn Prompter) -> Result<Option<usize>> {
        let text = if is_ur(raw.trim()) {
            match self.collect_ur(raw)? {
                Some(text) => text,
                None => return Ok(None),
            }
        } else {
            Zeroizing::new(raw.to_string())
        };

        let key = self.parser.resolve(&text, prompter)?;
        let fingerprint = key.fingerprint(&self.cache)?;
        let index = self.set.try_add(key)?;
        log::info!(
            "Accepted cosigner {} ({} of {})",
            fingerprint_hex(&fingerprint),
            self.set.len(),
            self.set.n()
        );
        Ok(Some(index))
    }

    /// True while an animated UR sequence is partially received
    pub fn ur_pending(&self) -> bool {
        self.scanner.is_pending()
    }

    fn collect_ur(&mut self, raw: &str) -> Result<Option<Zeroizing<String>>> {
        let mut decoded = None;
        for part in raw.split_whitespace() {
            match self.scanner.receive(part) {
                Ok(Some(bytes)) => {
                    decoded = Some(bytes);
                    break;
                }
                Ok(None) => {}
                Err(e) => {
                    self.scanner.reset();
                    return Err(e).context("Failed to decode UR payload");
                }
            }
        }

        match decoded {
            Some(bytes) => {
                let text = String::from_utf8(bytes).context("UR payload is not UTF-8 text")?;
                Ok(Some(Zeroizing::new(text)))
            }
            None => Ok(None),
        }
    }

    /// Payload for the cosigner at `index`
    pub fn export(&self, index: usize) -> Result<InterchangePayload> {
        Ok(self.set.export_for(index)?)
    }

    /// Assemble the wallet once the set is complete, write the setup file
    /// and clear the set. Returns `None` while cosigners are still missing.
    pub fn finish(&mut self) -> Result<Option<Finished>> {
        if !self.set.is_complete() {
            return Ok(None);
        }

        let assembler = WalletAssembler::new(Arc::clone(&self.cache));
        let mut wallet = assembler.assemble(
            self.set.m(),
            self.set.n(),
            self.policy,
            self.label.clone(),
            &self.set,
        )?;
        wallet.discard_secrets();

        let descriptor = wallet.to_descriptor()?.to_string();
        let setup = wallet.coordination_setup();
        write_setup(&self.setup_file, &setup)?;

        self.set.clear();
        log::info!("Wallet {} assembled, set cleared", self.label);

        Ok(Some(Finished {
            descriptor,
            setup,
            setup_file: self.setup_file.clone(),
        }))
    }
}

fn write_setup(path: &Path, setup: &str) -> Result<()> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create output directory: {}", dir.display()))?;
    }
    std::fs::write(path, setup)
        .with_context(|| format!("Failed to write setup file: {}", path.display()))
}

/// Read a payload from a file, or from stdin when `source` is `-`.
pub fn read_payload(source: &str) -> Result<Zeroizing<String>> {
    if source == "-" {
        let mut text = Zeroizing::new(String::new());
        std::io::stdin()
            .read_to_string(&mut text)
            .context("Failed to read payload from stdin")?;
        return Ok(text);
    }
    let contents = std::fs::read_to_string(source)
        .with_context(|| format!("Failed to read payload file: {}", source))?;
    Ok(Zeroizing::new(contents))
}

/// What the command line asked the session to do
#[derive(Debug, Default)]
pub struct Actions {
    pub generate: bool,
    /// Payload sources, `-` for stdin
    pub cosigners: Vec<String>,
    /// Zero-based set indices to export
    pub export: Vec<usize>,
}

/// Run a whole session and print its results.
///
/// A rejected cosigner is reported and skipped; the rest of the payloads are
/// still processed.
pub async fn run(
    config: &CoordinatorConfig,
    actions: &Actions,
    prompter: &mut dyn Prompter,
) -> Result<Option<Finished>> {
    let mut session = Session::new(config)?;

    if actions.generate {
        let generated = session.generate().await?;
        println!("New cosigner #{}", generated.index + 1);
        println!("WARNING: write these words down now. They will not be shown again.");
        println!();
        println!("    {}", generated.mnemonic.as_str());
        println!();
        println!("{}", generated.payload.to_json()?);
        println!("{}", generated.payload.to_ur()?);
    }

    for source in &actions.cosigners {
        let raw = match read_payload(source) {
            Ok(raw) => raw,
            Err(e) => {
                eprintln!("Skipping {}: {:#}", source, e);
                continue;
            }
        };
        match session.add_payload(&raw, prompter) {
            Ok(Some(index)) => println!("Added cosigner #{} from {}", index + 1, source),
            Ok(None) => println!("Read UR parts from {}, sequence not complete yet", source),
            Err(e) => {
                log::warn!("Rejected cosigner from {}: {:#}", source, e);
                eprintln!("Rejected {}: {:#}", source, e);
            }
        }
    }

    for &index in &actions.export {
        let payload = session
            .export(index)
            .with_context(|| format!("Cannot export cosigner #{}", index + 1))?;
        println!("{}", payload.to_json()?);
        println!("{}", payload.to_ur()?);
    }

    if session.ur_pending() {
        eprintln!("An animated UR sequence was left incomplete");
    }

    let set = session.set();
    if !set.is_complete() {
        println!("{} of {} cosigners collected", set.len(), set.n());
    }

    let finished = session.finish()?;
    if let Some(done) = &finished {
        println!("{}", done.descriptor);
        println!();
        print!("{}", done.setup);
        println!();
        println!("Setup written to {}", done.setup_file.display());
    }
    Ok(finished)
}
