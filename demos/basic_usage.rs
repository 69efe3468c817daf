//! Basic usage example for the stackpool allocators

use stackpool::{PoolAllocator, Result, StackAllocator};

struct Person {
    age: i32,
    name: String,
    haircolor: String,
}

impl Person {
    fn new(age: i32, name: &str, haircolor: &str) -> Self {
        println!("constructing {name}");
        Self {
            age,
            name: name.to_string(),
            haircolor: haircolor.to_string(),
        }
    }

    fn print(&self) {
        println!("{} {} {}", self.age, self.name, self.haircolor);
    }
}

impl Drop for Person {
    fn drop(&mut self) {
        println!("dropping {}", self.name);
    }
}

fn main() -> Result<()> {
    // Initialize logging
    env_logger::init();

    println!("stackpool allocators example");
    println!("============================");

    // Scoped stack allocation: a marker, a batch of objects, a rollback.
    let mut stack = StackAllocator::new(4096)?;
    let marker = stack.get_marker();

    let people = stack.allocate_objects_with(10, || {
        Person::new(-1, "Undefined Name", "Undefined Haircolor")
    })?;
    println!(
        "allocated 10 people, {} bytes used, {} finalizers pending",
        stack.used(),
        stack.pending_finalizers()
    );

    // The allocator owns the bytes; the pointer is valid until rollback.
    let people = unsafe { std::slice::from_raw_parts(people.as_ptr(), 10) };
    for person in people {
        person.print();
    }

    stack.rollback_to(marker)?;
    println!("rolled back, {} bytes used", stack.used());

    // Pool allocation: individual objects, freed in any order.
    let mut pool: PoolAllocator<Person> = PoolAllocator::new(16)?;

    let petra = pool.allocate(Person::new(18, "Petra", "Blond"))?;
    let peter = pool.allocate(Person::new(22, "Peter", "Braun"))?;
    println!("{} of {} pool slots in use", pool.allocated_count(), pool.capacity());

    if let Some(person) = pool.get(petra) {
        person.print();
    }
    if let Some(person) = pool.get(peter) {
        person.print();
    }

    pool.deallocate(petra)?;
    pool.deallocate(peter)?;

    println!("done");
    Ok(())
}
