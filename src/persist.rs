//! Writing compiled pages to the generated directory.
//!
//! The generated directory mirrors the registry one-to-one: every page name
//! becomes a file of the same name, rendered with an empty context. Render
//! failures are best-effort: they go to the registry's render-error hook and
//! never abort a save.

use crate::{
    log,
    registry::{Registry, TemplateError},
};
use rayon::prelude::*;
use std::{
    env,
    fs::{self, File},
    io::{self, BufWriter, Write},
    path::{Path, PathBuf},
};
use tera::Context;

impl Registry {
    /// Clear `output` and write every stored page into it.
    ///
    /// Refuses before touching disk if `output` is the working directory, the
    /// template directory, or a parent of either.
    pub fn save_all(&self, output: &Path) -> Result<usize, TemplateError> {
        ensure_safe_output(output, &self.settings().dir)?;

        remove_if_exists(output, |p| fs::remove_dir_all(p))?;
        fs::create_dir_all(output).map_err(|source| io_error(output, source))?;

        let context = Context::new();
        let written = self.with_pages(|pages| {
            let pages: Vec<_> = pages.iter().collect();
            pages
                .par_iter()
                .map(|(name, page)| {
                    let path = output.join(name.as_str());
                    let file = File::create(&path).map_err(|source| io_error(&path, source))?;
                    let mut writer = BufWriter::new(file);
                    let result = page
                        .render_to(&mut writer, &context)
                        .and_then(|()| writer.flush().map_err(|source| io_error(&path, source)));
                    if let Err(err) = result {
                        self.report_render_error(name, &err);
                    }
                    Ok(())
                })
                .collect::<Result<Vec<()>, TemplateError>>()
                .map(|done| done.len())
        })?;

        log!("save"; "wrote {} pages to {}", written, output.display());
        Ok(written)
    }

    /// Rewrite the single file `output/name` from its stored page.
    pub fn save_one(&self, name: &str, output: &Path) -> Result<(), TemplateError> {
        let path = output.join(name);
        remove_if_exists(&path, |p| fs::remove_file(p))?;

        let file = File::create(&path).map_err(|source| io_error(&path, source))?;
        let mut writer = BufWriter::new(file);
        let result = self
            .execute(&mut writer, name, &Context::new())
            .and_then(|()| writer.flush().map_err(|source| io_error(&path, source)));
        if let Err(err) = result {
            self.report_render_error(name, &err);
        }

        log!("save"; "wrote {}", path.display());
        Ok(())
    }
}

/// Reject outputs whose removal would take the working directory or the
/// template sources with them.
fn ensure_safe_output(output: &Path, sources: &Path) -> Result<(), TemplateError> {
    let cwd = env::current_dir().map_err(|source| io_error(Path::new("."), source))?;
    let target = resolve(output);

    // Empty until the first directory compile
    let sources = (!sources.as_os_str().is_empty()).then(|| resolve(sources));
    let mut protected = [Some(resolve(&cwd)), sources].into_iter().flatten();

    if protected.any(|path| path.starts_with(&target)) {
        return Err(TemplateError::UnsafeOutput(target));
    }
    Ok(())
}

/// Absolute form of `path`, following symlinks when it exists.
fn resolve(path: &Path) -> PathBuf {
    path.canonicalize()
        .or_else(|_| std::path::absolute(path))
        .unwrap_or_else(|_| path.to_path_buf())
}

fn remove_if_exists(path: &Path, remove: fn(&Path) -> io::Result<()>) -> Result<(), TemplateError> {
    match remove(path) {
        Err(err) if err.kind() != io::ErrorKind::NotFound => Err(io_error(path, err)),
        _ => Ok(()),
    }
}

fn io_error(path: &Path, source: io::Error) -> TemplateError {
    TemplateError::Io {
        path: path.to_path_buf(),
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::tests::{EXTRA, MASTER, leaf, site};
    use parking_lot::Mutex;
    use std::sync::Arc;

    fn compiled() -> (tempfile::TempDir, Registry) {
        let dir = site();
        let registry = Registry::new();
        registry
            .compile_directory("Master.html", dir.path(), &["Extra.html"])
            .unwrap();
        (dir, registry)
    }

    #[test]
    fn test_save_all_mirrors_registry() {
        let (_src, registry) = compiled();
        let out = tempfile::tempdir().unwrap();
        let generated = out.path().join("generated");

        assert_eq!(registry.save_all(&generated).unwrap(), 2);

        let mut files: Vec<_> = fs::read_dir(&generated)
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        files.sort();
        assert_eq!(files, vec!["About.html", "Home.html"]);
        assert_eq!(
            fs::read_to_string(generated.join("Home.html")).unwrap(),
            "<html><nav>Home.html</nav>home</html>"
        );
    }

    #[test]
    fn test_save_all_clears_stale_files() {
        let (_src, registry) = compiled();
        let out = tempfile::tempdir().unwrap();
        fs::write(out.path().join("Stale.html"), "old").unwrap();

        registry.save_all(out.path()).unwrap();
        assert!(!out.path().join("Stale.html").exists());
        assert!(out.path().join("Home.html").exists());
    }

    #[test]
    fn test_save_all_refuses_working_directory() {
        let (_src, registry) = compiled();
        let cwd = env::current_dir().unwrap();

        let err = registry.save_all(Path::new(".")).unwrap_err();
        assert!(matches!(err, TemplateError::UnsafeOutput(_)));
        let err = registry.save_all(&cwd).unwrap_err();
        assert!(matches!(err, TemplateError::UnsafeOutput(_)));
        // Parent of the working directory is just as fatal
        if let Some(parent) = cwd.parent() {
            assert!(registry.save_all(parent).is_err());
        }
        assert!(cwd.exists());
    }

    #[test]
    fn test_save_all_refuses_parent_of_template_dir() {
        let root = tempfile::tempdir().unwrap();
        let site = root.path().join("site");
        let templates = site.join("templates");
        fs::create_dir_all(&templates).unwrap();
        fs::write(templates.join("Master.html"), MASTER).unwrap();
        fs::write(templates.join("Extra.html"), EXTRA).unwrap();
        fs::write(templates.join("Home.html"), leaf("home")).unwrap();

        let registry = Registry::new();
        registry
            .compile_directory("Master.html", &templates, &["Extra.html"])
            .unwrap();

        for output in [&site, &templates] {
            let err = registry.save_all(output).unwrap_err();
            assert!(matches!(err, TemplateError::UnsafeOutput(_)));
        }
        assert!(templates.join("Home.html").exists());

        // A sibling of the template dir is fine
        assert_eq!(registry.save_all(&site.join("generated")).unwrap(), 1);
    }

    #[test]
    fn test_save_all_swallows_render_errors() {
        let src = site();
        fs::write(src.path().join("Data.html"), leaf("{{ title }}")).unwrap();
        let registry = Registry::new();
        registry
            .compile_directory("Master.html", src.path(), &["Extra.html"])
            .unwrap();

        let failures = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&failures);
        registry.set_render_error_hook(move |name, err| {
            assert!(matches!(err, TemplateError::Render { .. }));
            sink.lock().push(name.to_owned());
        });

        let out = tempfile::tempdir().unwrap();
        assert_eq!(registry.save_all(out.path()).unwrap(), 3);
        assert_eq!(*failures.lock(), vec!["Data.html".to_string()]);
        assert!(out.path().join("Data.html").exists());
        assert!(out.path().join("Home.html").exists());
    }

    #[test]
    fn test_save_one_rewrites_single_file() {
        let (src, registry) = compiled();
        let out = tempfile::tempdir().unwrap();
        registry.save_all(out.path()).unwrap();
        let about_before = fs::read_to_string(out.path().join("About.html")).unwrap();

        fs::write(src.path().join("Home.html"), leaf("changed")).unwrap();
        registry
            .compile_template("Home.html", "Master.html", src.path(), &["Extra.html"])
            .unwrap();
        registry.save_one("Home.html", out.path()).unwrap();

        assert_eq!(
            fs::read_to_string(out.path().join("Home.html")).unwrap(),
            "<html><nav>Home.html</nav>changed</html>"
        );
        assert_eq!(
            fs::read_to_string(out.path().join("About.html")).unwrap(),
            about_before
        );
    }

    #[test]
    fn test_save_one_missing_output_dir() {
        let (_src, registry) = compiled();
        let out = tempfile::tempdir().unwrap();
        let err = registry
            .save_one("Home.html", &out.path().join("missing"))
            .unwrap_err();
        assert!(matches!(err, TemplateError::Io { .. }));
    }

    #[test]
    fn test_save_one_unknown_page_reports_not_found() {
        let (_src, registry) = compiled();
        let failures = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&failures);
        registry.set_render_error_hook(move |_, err| sink.lock().push(err.is_not_found()));

        let out = tempfile::tempdir().unwrap();
        registry.save_one("Nope.html", out.path()).unwrap();
        assert_eq!(*failures.lock(), vec![true]);
    }
}
