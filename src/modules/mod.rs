pub mod books;

use shelf_kernel::ModuleRegistry;

/// Register every application module with the registry.
pub fn register_all(registry: &mut ModuleRegistry) -> anyhow::Result<()> {
    registry.register(books::create_module())?;
    Ok(())
}
