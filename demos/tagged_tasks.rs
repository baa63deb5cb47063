use deferred::{Scheduler, Task};
use std::sync::Mutex;
use std::time::Duration;

/// Shared application state handed to every task.
#[derive(Default)]
struct Inventory {
    stock: Mutex<Vec<(String, u32)>>,
}

struct Restock {
    item: String,
    quantity: u32,
}

struct Report;

impl Task<Inventory> for Restock {
    fn run(self, inventory: &Inventory, _at: i64) {
        let mut stock = inventory.stock.lock().unwrap();
        match stock.iter_mut().find(|(item, _)| *item == self.item) {
            Some((_, quantity)) => *quantity += self.quantity,
            None => stock.push((self.item, self.quantity)),
        }
    }
}

impl Task<Inventory> for Report {
    fn run(self, inventory: &Inventory, scheduled_at: i64) {
        println!("Stock report due at {}:", scheduled_at);
        for (item, quantity) in inventory.stock.lock().unwrap().iter() {
            println!("  {:<10} {}", item, quantity);
        }
    }
}

/// Every kind of work this scheduler accepts.
#[derive(Task)]
enum InventoryTask {
    Restock(Restock),
    Report(Report),
}

fn restock(item: &str, quantity: u32) -> InventoryTask {
    InventoryTask::Restock(Restock {
        item: item.to_string(),
        quantity,
    })
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let scheduler: Scheduler<InventoryTask, Inventory> = Scheduler::new(Inventory::default());

    scheduler.schedule_in(restock("apples", 40), 100)?;
    scheduler.schedule_in(restock("pears", 15), 200)?;
    scheduler.schedule_in(InventoryTask::Report(Report), 300)?;
    scheduler.schedule_in(restock("apples", 10), 400)?;
    scheduler.schedule_in(InventoryTask::Report(Report), 500)?;

    scheduler.start()?;
    std::thread::sleep(Duration::from_millis(700));
    scheduler.stop();

    Ok(())
}
